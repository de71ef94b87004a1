#[derive(Debug)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

pub fn validate_email_address(email: &str) -> Validity {
    if email.chars().count() > 320 {
        return Validity::Invalid(String::from("Email address is too long."));
    }

    for c in email.chars() {
        if c == ' ' || !c.is_ascii() {
            return Validity::Invalid(String::from("Email address cannot contain a space."));
        }
    }

    if email.contains("@.") {
        return Validity::Invalid(String::from(
            "Domain name in email address cannot begin with a period.",
        ));
    }

    let email = match email.split_once('@') {
        Some(s) => s,
        None => {
            return Validity::Invalid(String::from("Email address must contain an at symbol (@)."))
        }
    };

    if email.0.is_empty() || email.1.len() < 3 {
        return Validity::Invalid(String::from("Email username or domain name is too short."));
    }

    if email.1.contains('@') || !email.1.contains('.') {
        return Validity::Invalid(String::from(
            "Email address must have only one at symbol (@) and the domain must contain a period.",
        ));
    }

    if email.1.ends_with('.') {
        return Validity::Invalid(String::from("Email address cannot end with a period."));
    }

    Validity::Valid
}

pub fn validate_password(password: &str) -> Validity {
    if password.chars().count() < 12 {
        return Validity::Invalid(String::from(
            "Password must be at least 12 characters long.",
        ));
    }

    if password.len() > 512 {
        return Validity::Invalid(String::from("Password is too long."));
    }

    Validity::Valid
}

pub fn validate_display_name(name: &str) -> Validity {
    if name.trim().is_empty() {
        return Validity::Invalid(String::from("Display name cannot be empty."));
    }

    if name.chars().count() > 100 {
        return Validity::Invalid(String::from("Display name is too long."));
    }

    Validity::Valid
}

pub fn validate_budget_slug(slug: &str) -> Validity {
    if slug.len() < 2 || slug.len() > 60 {
        return Validity::Invalid(String::from(
            "Budget slug must be between 2 and 60 characters long.",
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Validity::Invalid(String::from(
            "Budget slug may only contain lowercase letters, digits, and hyphens.",
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Validity::Invalid(String::from(
            "Budget slug cannot begin or end with a hyphen.",
        ));
    }

    Validity::Valid
}

pub fn validate_category_color(color: &str) -> Validity {
    let mut chars = color.chars();

    if chars.next() != Some('#') || color.len() != 7 {
        return Validity::Invalid(String::from(
            "Category color must be a hex color in #rrggbb form.",
        ));
    }

    if !chars.all(|c| c.is_ascii_hexdigit()) {
        return Validity::Invalid(String::from(
            "Category color must be a hex color in #rrggbb form.",
        ));
    }

    Validity::Valid
}

pub fn validate_item_name(name: &str) -> Validity {
    if name.trim().is_empty() {
        return Validity::Invalid(String::from("Name cannot be empty."));
    }

    if name.chars().count() > 200 {
        return Validity::Invalid(String::from("Name is too long."));
    }

    Validity::Valid
}

pub fn validate_amount_cents(amount_cents: i64) -> Validity {
    if amount_cents <= 0 {
        return Validity::Invalid(String::from("Amount must be greater than zero."));
    }

    if amount_cents > 99_999_999_999 {
        return Validity::Invalid(String::from("Amount is too large."));
    }

    Validity::Valid
}
