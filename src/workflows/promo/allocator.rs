use super::domain::{Promo, PromoKind};

/// Raised when a claim finds no redemption unit left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("no redemption units remain")]
    Exhausted,
}

/// Claim exactly one redemption unit from `promo`, returning the code to
/// deliver.
///
/// COMMON mode advances the shared counter and returns the shared code;
/// UNIQUE mode returns the pool entry at the consumption cursor and advances
/// it, so the pool is handed out front to back and no entry is returned
/// twice. The caller must hold the promo's lock for the whole
/// claim-and-record step; this is the only code path that mutates
/// consumption state.
pub(crate) fn claim_unit(promo: &mut Promo) -> Result<String, AllocationError> {
    let code = match &promo.kind {
        PromoKind::Common { code, max_count } => {
            if promo.used_count >= *max_count {
                return Err(AllocationError::Exhausted);
            }
            code.clone()
        }
        PromoKind::Unique { codes } => match codes.get(promo.used_count as usize) {
            Some(code) => code.clone(),
            None => return Err(AllocationError::Exhausted),
        },
    };

    promo.used_count += 1;
    Ok(code)
}
