/*
Errors raised by the periodic boundary code.

Box-shape problems are returned as values so the caller can decide whether
they are fatal (setup) or only worth a warning (during a run, where
`correct_box` repairs them).
*/

use crate::constants::Real;
use crate::pbc::cell::Axis;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PbcError {
    #[error(
        "only triclinic boxes with the first vector parallel to the x-axis and the second \
         vector in the xy-plane are supported"
    )]
    NotLowerTriangular,

    #[error("the unit cell can not have off-diagonal x-components with screw pbc")]
    ScrewOffDiagonal,

    #[error(
        "triclinic box is too skewed: |box[{row}][{col}]| = {value} exceeds {limit}"
    )]
    TooSkewed {
        row: Axis,
        col: Axis,
        value: Real,
        limit: Real,
    },

    #[error("can not put atoms in a compact unit cell with unsupported pbc: {0}")]
    UnsupportedBox(String),

    #[error("invalid cell: {0}")]
    InvalidCell(String),

    #[error("unknown pbc type '{0}'")]
    UnknownPbc(String),

    #[error("could not read geometry configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid geometry configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PbcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_skewed_message_names_the_element() {
        let err = PbcError::TooSkewed {
            row: Axis::Y,
            col: Axis::X,
            value: 6.0,
            limit: 5.005,
        };
        let message = err.to_string();
        assert!(message.contains("box[y][x]"));
        assert!(message.contains("too skewed"));
    }

    #[test]
    fn config_errors_convert_from_serde() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: PbcError = parse.unwrap_err().into();
        assert!(matches!(err, PbcError::Config(_)));
    }
}
