//! External data providers: the Arweave chain gateway and IPFS gateways.

pub mod arweave;
pub mod ipfs;
