use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);
    };
}

id_newtype!(RequestToken);

impl RequestToken {
    /// Token issued after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Route prefix under which stored uploads are addressable.
pub const UPLOADS_ROUTE_PREFIX: &str = "/uploads";

pub fn public_path_for(file_name: &str) -> String {
    format!("{UPLOADS_ROUTE_PREFIX}/{file_name}")
}
