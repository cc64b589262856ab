use crate::cli::schema::SchemaCliArgs;
use crate::schema::{self, SchemaError, SchemaVersion};

/// Validated schema selection
#[derive(Debug, Clone, Default)]
pub struct SchemaArgs {
    pub version: Option<u32>,
    pub collections: Vec<String>,
}

impl From<SchemaCliArgs> for SchemaArgs {
    fn from(args: SchemaCliArgs) -> Self {
        let mut collections: Vec<String> = Vec::new();
        for name in args.collections.into_iter().map(|name| name.trim().to_string()) {
            if !name.is_empty() && !collections.contains(&name) {
                collections.push(name);
            }
        }
        Self { version: args.schema_version, collections }
    }
}

impl SchemaArgs {
    /// Looks up the requested schema version, or the latest one, and checks it is well formed.
    pub fn resolve(&self) -> Result<SchemaVersion, SchemaError> {
        let schema = match self.version {
            Some(version) => schema::find(version)?,
            None => schema::latest()?,
        };
        schema.validate()?;
        Ok(schema)
    }
}
