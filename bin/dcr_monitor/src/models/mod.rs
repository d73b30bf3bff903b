use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};

mod job;
pub use job::*;

mod k8s;
pub use k8s::*;

mod gcp;
pub use gcp::*;

pub type Pool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DBConn = PooledConnection<ConnectionManager<PgConnection>>;
