use tenebra_account::AddressKind;
use tenebra_transaction::TransactionVariant;

use crate::error::{Result, WalletError};

use super::Destination;

/// Pick the variant for a send from `source` to `destinations`: the pure
/// type when every party shares the source's address type, Mixed otherwise.
pub fn classify(source: AddressKind, destinations: &[Destination]) -> Result<TransactionVariant> {
    if destinations.is_empty() {
        return Err(WalletError::UnknownTransactionType);
    }
    let pure = destinations.iter().all(|d| d.address.kind() == source);
    Ok(match (pure, source) {
        (true, AddressKind::Stealth) => TransactionVariant::Private,
        (true, AddressKind::Transparent) => TransactionVariant::Transparent,
        (false, _) => TransactionVariant::Mixed,
    })
}

#[cfg(test)]
mod tests {
    use tenebra_account::{Address, StealthAddress, TransparentAddress};
    use tenebra_primitives::Point;

    use super::*;

    fn stealth(amount: u64) -> Destination {
        Destination {
            address: Address::Stealth(StealthAddress {
                view_key: Point::IDENTITY,
                spend_key: Point::IDENTITY,
            }),
            amount,
        }
    }

    fn transparent(amount: u64) -> Destination {
        Destination {
            address: Address::Transparent(TransparentAddress([7; 32])),
            amount,
        }
    }

    #[test]
    fn test_pure_types() {
        assert_eq!(
            classify(AddressKind::Stealth, &[stealth(1), stealth(2)]).unwrap(),
            TransactionVariant::Private
        );
        assert_eq!(
            classify(AddressKind::Transparent, &[transparent(1)]).unwrap(),
            TransactionVariant::Transparent
        );
    }

    #[test]
    fn test_any_crossing_is_mixed() {
        assert_eq!(
            classify(AddressKind::Transparent, &[stealth(1)]).unwrap(),
            TransactionVariant::Mixed
        );
        assert_eq!(
            classify(AddressKind::Stealth, &[stealth(1), transparent(1)]).unwrap(),
            TransactionVariant::Mixed
        );
    }

    #[test]
    fn test_no_destinations() {
        assert!(matches!(
            classify(AddressKind::Stealth, &[]),
            Err(WalletError::UnknownTransactionType)
        ));
    }
}
