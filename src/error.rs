use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("got {got} observations for {expected} configured marker ids")]
    ObservationCountMismatch { expected: usize, got: usize },
}
