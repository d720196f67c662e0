use log::debug;
use tenebra_account::StealthAddress;
use tenebra_primitives::Primitives;
use tenebra_transaction::{Transaction, TransactionPrefix, TransactionVariant, Witness};

use super::stealth_outputs;
use crate::error::{Result, WalletError};

/// Block reward paying stealth addresses. Amounts are public: every output
/// commits under the identity mask.
pub fn coinbase_transaction(
    p: &dyn Primitives,
    outputs: &[(StealthAddress, u64)],
) -> Result<Transaction> {
    if outputs.is_empty() {
        return Err(WalletError::InvalidTransaction("coinbase pays nobody"));
    }
    if outputs.iter().any(|(_, amount)| *amount == 0) {
        return Err(WalletError::InvalidAmount);
    }

    let (tx_secret, tx_public) = p.generate_keypair();
    let built = stealth_outputs(p, &tx_secret, outputs, true)?;
    let range_proof = p.range_prove(&built.amounts, &built.masks)?;

    let prefix = TransactionPrefix {
        variant: TransactionVariant::Coinbase,
        tx_public_key: Some(tx_public),
        transparent_inputs: Vec::new(),
        private_inputs: Vec::new(),
        transparent_outputs: Vec::new(),
        private_outputs: built.outputs,
        range_proof: Some(range_proof),
    };
    let tx = Transaction::new(prefix, Witness::default())?;
    debug!("coinbase {} with {} output(s)", tx.id(), outputs.len());
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use tenebra_account::PrivateKeys;
    use tenebra_primitives::RistrettoPrimitives;
    use tenebra_privacy::{IDENTITY_MASK, OutputSecret, verify_commitment};

    use super::*;

    #[test]
    fn test_coinbase_is_unblinded_and_recoverable() {
        let p = RistrettoPrimitives::new();
        let keys = PrivateKeys::generate(&p);
        let address = keys.address(&p);

        let tx = coinbase_transaction(&p, &[(address, 1000)]).unwrap();
        assert_eq!(tx.variant(), TransactionVariant::Coinbase);
        assert!(tx.uses_identity_mask());
        assert!(tx.range_proof().is_some());

        let output = tx.private_outputs()[0];
        let tx_public = tx.tx_public_key().unwrap();
        let secret = OutputSecret::receiver(&p, tx_public, &keys.view_secret, 0).unwrap();
        assert_eq!(secret.one_time_key(&p, &address.spend_key).unwrap(), output.one_time_key);

        let amount = secret.mask_amount(&p, output.masked_amount);
        assert_eq!(amount, 1000);
        assert!(verify_commitment(&p, &output.commitment, &IDENTITY_MASK, amount));
    }

    #[test]
    fn test_empty_coinbase_rejected() {
        let p = RistrettoPrimitives::new();
        assert!(coinbase_transaction(&p, &[]).is_err());
    }
}
