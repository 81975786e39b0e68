// Public modules
pub mod answer_payload;
pub mod citation;
pub mod content;
pub mod message;
pub mod pricing_item;
pub mod role;
pub mod selection_option;
pub mod table_view;
pub mod wire;

// Re-exports
pub use answer_payload::AnswerPayload;
pub use citation::Citation;
pub use content::{Content, StructuredContent, StructuredKind};
pub use message::Message;
pub use pricing_item::PricingItem;
pub use role::{AgentKind, Role};
pub use selection_option::SelectionOption;
pub use table_view::{SOURCE_COLUMN, TableView};
pub use wire::{AskRequest, ControlSignal, ResponsePayload, UploadAck};
