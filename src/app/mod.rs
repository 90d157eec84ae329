pub mod events;
pub mod manager;
pub mod state;

pub use events::{EventBus, EventCallback, EventType, WalletEvent};
pub use manager::{WalletCallback, WalletManager};
pub use state::WalletState;
