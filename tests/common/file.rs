use derive_new::new;
use fake::Fake;
use fake::faker::lorem::en::Words;

/// One file of a committed snapshot
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct FileSpec {
    pub path: String,
    pub content: String,
}

impl FileSpec {
    /// A file of `lines` random lines
    pub fn random(path: &str, lines: usize) -> Self {
        let content = (0..lines)
            .map(|_| {
                let words: Vec<String> = Words(2..6).fake();
                format!("{}\n", words.join(" "))
            })
            .collect();

        FileSpec::new(path.to_string(), content)
    }

    pub fn lines(&self) -> usize {
        self.content.lines().count()
    }
}

/// Replace or add `file` in `files`, keeping the rest
pub fn with_file(files: &[FileSpec], file: FileSpec) -> Vec<FileSpec> {
    let mut files = without_file(files, &file.path);
    files.push(file);
    files
}

pub fn without_file(files: &[FileSpec], path: &str) -> Vec<FileSpec> {
    files.iter().filter(|f| f.path != path).cloned().collect()
}
