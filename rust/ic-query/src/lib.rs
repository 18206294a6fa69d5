//! Cursor-paginated time-series query engine: query builder and
//! record-id codec (C9, C10).

pub mod backend;
pub mod builder;
pub mod error;
pub mod record_id;

pub use backend::{Backend, HttpInfluxBackend};
pub use builder::{
    DateRange, Direction, EntityConfig, FieldValue, Filter, PaginationInfo, PaginationRequest,
    QueryBuilder, Row,
};
pub use error::{BackendError, QueryBuilderError, RecordIdError};
