//! Clamp-and-transfer on encrypted amounts
//!
//! Guards on encrypted values cannot branch. A request larger than what is
//! available is instead replaced by the limit through an oblivious select,
//! and the clamped amount is applied to both sides of the move.

use novalend_fhe::{Euint64, FHEResult, FheBackend, FheScope};

/// `amount > limit ? limit : amount`
pub fn clamp<B: FheBackend>(scope: &mut FheScope<'_, B>, amount: Euint64, limit: Euint64) -> FHEResult<Euint64> {
    let too_much = scope.gt(amount, limit)?;
    scope.select(too_much, limit, amount)
}

/// Result of moving a clamped amount between two encrypted balances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedMove {
    /// Amount actually moved, `min(amount, from_balance)`
    pub moved: Euint64,
    pub from_balance: Euint64,
    pub to_balance: Euint64,
}

/// Debit `from_balance` and credit `to_balance` by the clamped amount
///
/// Both new balances are computed before either is committed by the caller.
pub fn clamped_move<B: FheBackend>(
    scope: &mut FheScope<'_, B>,
    amount: Euint64,
    from_balance: Euint64,
    to_balance: Euint64,
) -> FHEResult<ClampedMove> {
    let moved = clamp(scope, amount, from_balance)?;
    let from_after = scope.sub(from_balance, moved)?;
    let to_after = scope.add(to_balance, moved)?;
    Ok(ClampedMove {
        moved,
        from_balance: from_after,
        to_balance: to_after,
    })
}
