//! Domain layer of the Sake chain-sandbox orchestrator.
//!
//! Holds the session model and registry, the observable state stores, the
//! chain data model and the network-adapter port. Everything here is
//! backend- and UI-agnostic: concrete transports live in `sake-network`
//! and `sake-application`, file persistence in `sake-storage`.

pub mod account;
pub mod adapter;
pub mod contract;
pub mod error;
pub mod fingerprint;
pub mod notice;
pub mod session;
pub mod store;
pub mod testing;
pub mod transaction;

// Re-export common error type
pub use error::{Result, SakeError};

pub use account::{Account, Address};
pub use adapter::{
    CallRequest, ChainInfo, DeployRequest, NetworkAdapter, NetworkConfig, NetworkDump,
    OnchainContract, TransactOutcome,
};
pub use contract::{CompiledContract, DeployedContract, ImplementationContract};
pub use notice::{Notice, NoticeLevel, NoticeSink};
pub use session::{
    PersistenceMeta, Session, SessionInfo, SessionKind, SessionObserver, SessionRegistry,
    SessionSnapshot, SessionState,
};
pub use store::{StateStore, SubscriptionHandle};
pub use transaction::{TransactionRecord, TxOutput};

/// The single workspace-wide compiled-contract store.
///
/// Compilation is a workspace-wide, backend-wide concept: every session
/// observes the same compiled set, so this store lives outside any
/// session and is unaffected by session switching.
pub type CompiledContractStore = StateStore<Vec<CompiledContract>>;
