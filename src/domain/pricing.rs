//! Order totals. All amounts are integer cents.

use serde::Serialize;
use utoipa::ToSchema;

/// Sales tax applied at checkout, in percent.
pub const TAX_RATE_PERCENT: i64 = 6;

/// Highest listing price accepted, in cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Highest quantity a single cart line may hold.
pub const MAX_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order total is too large")]
pub struct Overflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
}

/// Tax on `subtotal`, rounded half-up to the cent.
pub fn tax_for(subtotal: i64) -> Result<i64, Overflow> {
    subtotal
        .checked_mul(TAX_RATE_PERCENT)
        .and_then(|t| t.checked_add(50))
        .map(|t| t.div_euclid(100))
        .ok_or(Overflow)
}

pub fn line_total(price: i64, quantity: i32) -> Result<i64, Overflow> {
    price.checked_mul(i64::from(quantity)).ok_or(Overflow)
}

/// Breakdown for `(unit_price, quantity)` lines.
pub fn breakdown<I>(lines: I) -> Result<PriceBreakdown, Overflow>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    let mut subtotal: i64 = 0;
    for (price, quantity) in lines {
        subtotal = subtotal
            .checked_add(line_total(price, quantity)?)
            .ok_or(Overflow)?;
    }
    let tax = tax_for(subtotal)?;
    Ok(PriceBreakdown {
        subtotal,
        tax,
        total: subtotal.checked_add(tax).ok_or(Overflow)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_books_and_one_more() {
        let b = breakdown([(1000, 2), (500, 1)]).unwrap();
        assert_eq!(b.subtotal, 2500);
        assert_eq!(b.tax, 150);
        assert_eq!(b.total, 2650);
    }

    #[test]
    fn tax_rounds_half_up_to_the_cent() {
        // 6% of 0.25 is 0.015
        assert_eq!(tax_for(25), Ok(2));
        // 6% of 0.24 is 0.0144
        assert_eq!(tax_for(24), Ok(1));
        // 6% of 9.99 is 0.5994
        assert_eq!(tax_for(999), Ok(60));
    }

    #[test]
    fn empty_cart_costs_nothing() {
        let b = breakdown(std::iter::empty()).unwrap();
        assert_eq!(b, PriceBreakdown { subtotal: 0, tax: 0, total: 0 });
    }

    #[test]
    fn huge_amounts_are_rejected_instead_of_wrapping() {
        assert_eq!(breakdown([(i64::MAX / 2, 3)]), Err(Overflow));
        assert_eq!(breakdown([(i64::MAX / 2, 1), (i64::MAX / 2, 1), (2, 1)]), Err(Overflow));
        assert_eq!(tax_for(i64::MAX / 6), Err(Overflow));
    }

    #[test]
    fn largest_allowed_cart_line_fits() {
        let b = breakdown([(MAX_PRICE_CENTS, MAX_QUANTITY)]).unwrap();
        assert_eq!(b.subtotal, 9_900_000_000);
        assert_eq!(b.total, 10_494_000_000);
    }
}
