use anyhow::{Result, anyhow};

pub fn validate_email(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(anyhow!("Email address cannot be empty"));
    }

    if address.len() > 254 {
        return Err(anyhow!("Email address too long (maximum 254 characters)"));
    }

    let Some((local, domain)) = address.split_once('@') else {
        return Err(anyhow!("Email address must contain '@'"));
    };

    if local.is_empty() || domain.is_empty() {
        return Err(anyhow!("Email address has empty local part or domain"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(anyhow!("Email domain is malformed"));
    }

    if address.contains(char::is_whitespace) {
        return Err(anyhow!("Email address contains whitespace"));
    }

    Ok(())
}

pub fn validate_phone(number: &str) -> Result<()> {
    if number.is_empty() {
        return Err(anyhow!("Phone number cannot be empty"));
    }

    let valid_chars = number
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ' || c == '(' || c == ')');

    if !valid_chars {
        return Err(anyhow!("Phone number contains invalid characters"));
    }

    let digits = number.chars().filter(char::is_ascii_digit).count();

    if digits < 10 {
        return Err(anyhow!("Phone number too short (minimum 10 digits)"));
    }

    if digits > 15 {
        return Err(anyhow!("Phone number too long (maximum 15 digits)"));
    }

    Ok(())
}
