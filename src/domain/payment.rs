//! Shape checks for the checkout form. Nothing is charged; the card fields
//! only have to look plausible.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must not contain digits")]
    HasDigits(&'static str),
    #[error("postal code must be numeric")]
    PostalCode,
    #[error("card number must be exactly 16 digits")]
    CardNumber,
    #[error("expiry must be in MM/YY format")]
    Expiry,
    #[error("CVV must be 3 or 4 digits")]
    Cvv,
}

pub struct ShippingAddress<'a> {
    pub address: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
}

pub struct CardDetails<'a> {
    pub number: &'a str,
    pub expiry: &'a str,
    pub cvv: &'a str,
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn lettered(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        return Err(FormError::Missing(field));
    }
    if value.chars().any(|c| c.is_ascii_digit()) {
        return Err(FormError::HasDigits(field));
    }
    Ok(())
}

pub fn validate_address(addr: &ShippingAddress<'_>) -> Result<(), FormError> {
    if addr.address.trim().is_empty() {
        return Err(FormError::Missing("address"));
    }
    lettered("city", addr.city)?;
    lettered("state", addr.state)?;
    if !all_digits(addr.postal_code.trim()) {
        return Err(FormError::PostalCode);
    }
    lettered("country", addr.country)?;
    Ok(())
}

pub fn validate_card(card: &CardDetails<'_>) -> Result<(), FormError> {
    let number: String = card.number.trim().chars().filter(|c| *c != ' ').collect();
    if number.len() != 16 || !all_digits(&number) {
        return Err(FormError::CardNumber);
    }

    let expiry = card.expiry.trim();
    let (month, year) = expiry.split_once('/').ok_or(FormError::Expiry)?;
    if month.len() != 2 || year.len() != 2 || !all_digits(month) || !all_digits(year) {
        return Err(FormError::Expiry);
    }
    let month: u8 = month.parse().map_err(|_| FormError::Expiry)?;
    if !(1..=12).contains(&month) {
        return Err(FormError::Expiry);
    }

    let cvv = card.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !all_digits(cvv) {
        return Err(FormError::Cvv);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress<'static> {
        ShippingAddress {
            address: "12 Jalan Ampang",
            city: "Kuala Lumpur",
            state: "Selangor",
            postal_code: "50450",
            country: "Malaysia",
        }
    }

    fn card() -> CardDetails<'static> {
        CardDetails {
            number: "4111 1111 1111 1111",
            expiry: "09/27",
            cvv: "123",
        }
    }

    #[test]
    fn accepts_well_formed_input() {
        assert_eq!(validate_address(&address()), Ok(()));
        assert_eq!(validate_card(&card()), Ok(()));
    }

    #[test]
    fn street_may_contain_digits_but_city_may_not() {
        let addr = ShippingAddress { city: "District 9", ..address() };
        assert_eq!(validate_address(&addr), Err(FormError::HasDigits("city")));
    }

    #[test]
    fn postal_code_must_be_numeric() {
        let addr = ShippingAddress { postal_code: "5O450", ..address() };
        assert_eq!(validate_address(&addr), Err(FormError::PostalCode));
        let addr = ShippingAddress { postal_code: "", ..address() };
        assert_eq!(validate_address(&addr), Err(FormError::PostalCode));
    }

    #[test]
    fn empty_country_is_missing() {
        let addr = ShippingAddress { country: "  ", ..address() };
        assert_eq!(validate_address(&addr), Err(FormError::Missing("country")));
    }

    #[test]
    fn card_number_length_is_exact() {
        let short = CardDetails { number: "4111 1111 1111 111", ..card() };
        assert_eq!(validate_card(&short), Err(FormError::CardNumber));
        let long = CardDetails { number: "41111111111111112", ..card() };
        assert_eq!(validate_card(&long), Err(FormError::CardNumber));
        let dashed = CardDetails { number: "4111-1111-1111-1111", ..card() };
        assert_eq!(validate_card(&dashed), Err(FormError::CardNumber));
    }

    #[test]
    fn expiry_month_range_and_shape() {
        for bad in ["13/27", "00/27", "9/27", "09-27", "09/2027", "ab/cd"] {
            let c = CardDetails { expiry: bad, ..card() };
            assert_eq!(validate_card(&c), Err(FormError::Expiry), "{bad}");
        }
        let c = CardDetails { expiry: "12/30", ..card() };
        assert_eq!(validate_card(&c), Ok(()));
    }

    #[test]
    fn cvv_three_or_four_digits() {
        let four = CardDetails { cvv: "1234", ..card() };
        assert_eq!(validate_card(&four), Ok(()));
        for bad in ["12", "12345", "12a"] {
            let c = CardDetails { cvv: bad, ..card() };
            assert_eq!(validate_card(&c), Err(FormError::Cvv), "{bad}");
        }
    }
}
