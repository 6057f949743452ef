//! Validation utilities for farm, weather and account input

use rust_decimal::Decimal;

// ============================================================================
// Account Validations
// ============================================================================

/// Validate username (3-150 characters, letters, digits and @ . + - _)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 150 {
        return Err("Username must be at most 150 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err("Username may only contain letters, digits and @/./+/-/_");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate phone number (7-15 digits, optional leading +, spaces and dashes allowed)
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err("Phone number may only contain digits, spaces and dashes");
    }
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

// ============================================================================
// Farm Validations
// ============================================================================

/// Validate farm name is non-blank and reasonably short
pub fn validate_farm_name(name: &str) -> Result<(), &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Farm name is required");
    }
    if name.chars().count() > 100 {
        return Err("Farm name must be at most 100 characters");
    }
    Ok(())
}

/// Validate GPS coordinates
pub fn validate_coordinates(latitude: Decimal, longitude: Decimal) -> Result<(), &'static str> {
    if latitude < Decimal::from(-90) || latitude > Decimal::from(90) {
        return Err("Latitude must be between -90 and 90");
    }
    if longitude < Decimal::from(-180) || longitude > Decimal::from(180) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Validate that a farm has somewhere to look up weather for: a place name,
/// a complete coordinate pair, or both
pub fn validate_farm_location(
    place: Option<&str>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
) -> Result<(), &'static str> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => validate_coordinates(lat, lon),
        (Some(_), None) | (None, Some(_)) => {
            Err("Latitude and longitude must be provided together")
        }
        (None, None) => {
            if place.map(str::trim).is_some_and(|p| !p.is_empty()) {
                Ok(())
            } else {
                Err("Provide a location name or coordinates")
            }
        }
    }
}

/// Validate total farm area in hectares
pub fn validate_total_area(area: Decimal) -> Result<(), &'static str> {
    if area <= Decimal::ZERO {
        return Err("Total area must be greater than zero");
    }
    Ok(())
}

// ============================================================================
// Weather Validations
// ============================================================================

/// Validate temperature in °C is physically plausible
pub fn validate_temperature(celsius: f64) -> Result<(), &'static str> {
    if !celsius.is_finite() || !(-90.0..=60.0).contains(&celsius) {
        return Err("Temperature must be between -90 and 60 °C");
    }
    Ok(())
}

/// Validate relative humidity percentage
pub fn validate_humidity(percent: f64) -> Result<(), &'static str> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err("Humidity must be between 0 and 100%");
    }
    Ok(())
}

/// Validate rainfall in mm
pub fn validate_rainfall(mm: f64) -> Result<(), &'static str> {
    if !mm.is_finite() || mm < 0.0 {
        return Err("Rainfall cannot be negative");
    }
    Ok(())
}

/// Validate wind speed in km/h
pub fn validate_wind_speed(kmh: f64) -> Result<(), &'static str> {
    if !kmh.is_finite() || kmh < 0.0 {
        return Err("Wind speed cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Question Validations
// ============================================================================

/// Validate question or answer text is non-blank
pub fn validate_text(text: &str, max_chars: usize) -> Result<(), &'static str> {
    let text = text.trim();
    if text.is_empty() {
        return Err("This field is required");
    }
    if text.chars().count() > max_chars {
        return Err("Text is too long");
    }
    Ok(())
}
