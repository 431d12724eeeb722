pub mod atomic_write;
pub mod data_dir;
pub mod log_buffer;
pub mod sos;
