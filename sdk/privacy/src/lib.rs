//! Tenebra Privacy SDK
//!
//! RingCT-style building blocks for confidential transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Confidential Transaction                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │ Ring inputs  │  │ Pseudo-outs  │  │   Stealth outputs     │ │
//! │  │ (64 members) │  │ (balancing)  │  │ (one-time key, C, a') │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  CLSAG per input + one aggregated range proof            │   │
//! │  │  • Spend authority over one hidden ring member           │   │
//! │  │  • Linking tag for double-spend detection                │   │
//! │  │  • Balance: Σ pseudo-outputs = Σ output commitments     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes the curve backend as `&dyn Primitives`; nothing in
//! this crate does group arithmetic itself.

pub mod amount;
pub mod balance;
pub mod commitment;
pub mod decoy;
pub mod error;
pub mod linking_tag;
pub mod ring;
pub mod stealth;

pub use amount::{
    gen_amount_mask, gen_amount_mask_recover, gen_commitment_mask, recover_commitment_mask,
};
pub use balance::{PseudoOutput, balance_pseudo_outputs};
pub use commitment::{IDENTITY_MASK, commit, sum_points, verify_commitment};
pub use decoy::{DecoySelection, RING_SIZE, select_decoys};
pub use error::PrivacyError;
pub use linking_tag::LinkingTag;
pub use ring::{AnonymitySet, RingMember, sign_ring};
pub use stealth::{OutputSecret, check_for_balance, derive_one_time_key, recover_one_time_secret};
