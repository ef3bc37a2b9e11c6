/// On-chain bindings for the intent settlement contract.
pub mod settlement;
