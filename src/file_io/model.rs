/// Structs that are persisted on the user's disk are kept apart from the structs used by the
/// application logic, so that a refactoring of the latter cannot silently break deserialization
/// of files written by an older version.
///
/// The rules for persisted data:
/// - Every struct annotated with #[derive(Serialize)] for persistence resides in the file_io
///   module and is not public. Other modules use a separate struct without
///   #[derive(Serialize)], and the data is converted between the two.
/// - Persisted structs carry a version suffix, e.g. V1, V2. To rename or change a field, add a
///   new version instead of changing the existing struct, and keep reading the old one until
///   (almost) no user has data in the old format lying around.
pub trait Versioned<T>: From<T> + Into<T> {}
