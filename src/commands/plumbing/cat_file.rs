use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::resolve_revision;
use crate::artifacts::core::error::{DiffError, DiffResult};
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;

const MIN_PREFIX: usize = 4;

impl Repository {
    /// Pretty-print a stored object named by id, unique id prefix or revision
    pub fn cat_file(&self, name: &str, mut writer: impl Write) -> DiffResult<()> {
        let oid = self.lookup_object(name)?;
        let object = self.database().parse_object(&oid)?;

        writeln!(writer, "{}", object.display().trim_end_matches('\n'))?;
        Ok(())
    }

    fn lookup_object(&self, name: &str) -> DiffResult<ObjectId> {
        if name.len() >= MIN_PREFIX && name.chars().all(|c| c.is_ascii_hexdigit()) {
            match self.database().find_objects_by_prefix(name)?.as_slice() {
                [oid] => return Ok(oid.clone()),
                [] => {}
                _ => {
                    return Err(DiffError::UnknownRef {
                        name: name.to_string(),
                    });
                }
            }
        }

        resolve_revision(self, name)
    }
}
