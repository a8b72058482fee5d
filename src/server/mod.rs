pub mod router;
pub mod sftp_handler;
pub mod ssh;
