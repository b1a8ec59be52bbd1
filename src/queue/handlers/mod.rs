pub mod dead_letter;
pub mod file_processing;
pub mod notifications;
pub mod print_events;
pub mod shopify_sync;

pub use dead_letter::DeadLetterHandler;
pub use file_processing::FileProcessingHandler;
pub use notifications::NotificationsHandler;
pub use print_events::PrintEventsHandler;
pub use shopify_sync::ShopifySyncHandler;
