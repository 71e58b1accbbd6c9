mod conn;

pub use conn::{Conn, PreparedInfo};
pub use conn::read_payload;
