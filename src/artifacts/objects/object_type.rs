use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }

    /// Consume the `<kind> <size>\0` header and return the kind.
    ///
    /// The declared size must match the number of bytes left in `data_reader`
    /// when `remaining` is given.
    pub fn parse_object_type(
        data_reader: &mut impl BufRead,
        remaining: Option<usize>,
    ) -> anyhow::Result<ObjectType> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;
        if object_type.pop() != Some(b' ') {
            anyhow::bail!("missing object type terminator");
        }

        let object_type = std::str::from_utf8(&object_type)?;
        let object_type = ObjectType::try_from(object_type)?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.pop() != Some(b'\0') {
            anyhow::bail!("missing object size terminator");
        }

        let size: usize = std::str::from_utf8(&size)?.parse()?;
        if let Some(remaining) = remaining
            && remaining != size + Self::header_len(object_type, size)
        {
            anyhow::bail!("declared size {size} does not match stored content");
        }

        Ok(object_type)
    }

    fn header_len(object_type: ObjectType, size: usize) -> usize {
        // "<kind> <size>\0"
        object_type.as_str().len() + 1 + size.to_string().len() + 1
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            _ => Err(anyhow::anyhow!("Invalid object type '{value}'")),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
