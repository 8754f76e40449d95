pub mod ipc_channel;
pub mod ipc_message;
pub mod process;
pub mod space;
pub mod tab;
pub mod tab_group;

pub use ipc_channel::IpcChannel;
pub use ipc_message::IpcMessage;
pub use process::ProcessRecord;
pub use space::Space;
pub use tab::Tab;
pub use tab_group::TabGroup;
