//! treasury-domain
//!
//! Pure domain models (Ledger, Account, Party, Investor, Voucher, Entry, settlement records).
//! No I/O, no storage. Only data types, invariants that hold per record, and core enums.

pub mod account;
pub mod common;
pub mod investor;
pub mod ledger;
pub mod money;
pub mod party;
pub mod settlement;
pub mod updates;
pub mod voucher;

pub use account::*;
pub use common::*;
pub use investor::*;
pub use ledger::*;
pub use money::*;
pub use party::*;
pub use settlement::*;
pub use updates::*;
pub use voucher::*;
