use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not set up rules")]
    Setup,
    #[display("no such file or directory: {}", _0.display())]
    MissingPath(#[error(not(source))] PathBuf),
}
