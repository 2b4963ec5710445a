pub mod responses;

pub use responses::{
    CommandReply, MemoryResponse, RegistersResponse, StateResponse, VersionResponse,
};
