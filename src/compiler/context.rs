/// Контекст компиляции для передачи между модулями

use crate::common::diagnostics::Diagnostics;
use crate::compiler::modules::ModuleResolver;
use crate::compiler::operators::OperatorTables;

/// Путь-заглушка: исходник без каталога, локальные импорты запрещены
pub const NO_PATH: &str = "\0";

/// Каталог исходника, относительно которого разрешаются локальные импорты
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDir {
    Path(String),
    NoPath,
}

impl SourceDir {
    /// Каталог по пути файла: пустой путь это `.`, `NO_PATH` это отсутствие каталога
    pub fn from_file_path(path: &str) -> Self {
        if path.is_empty() {
            SourceDir::Path(".".to_string())
        } else if path == NO_PATH {
            SourceDir::NoPath
        } else {
            SourceDir::Path(parent_dir(path))
        }
    }

    pub fn as_path(&self) -> Option<&str> {
        match self {
            SourceDir::Path(dir) => Some(dir),
            SourceDir::NoPath => None,
        }
    }
}

pub struct CompilationContext<'a> {
    pub source_dir: &'a SourceDir,
    pub modules: &'a dyn ModuleResolver,
    pub diagnostics: &'a Diagnostics,
    pub operators: &'a OperatorTables,
}

/// Имя файла для грамматики: относительные пути очищаются лексически
pub fn normalize_filename(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        clean_path(path)
    }
}

/// Всё, кроме последнего элемента пути
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(i) => clean_path(&path[..=i]),
        None => ".".to_string(),
    }
}

pub fn join_path(dir: &str, file: &str) -> String {
    match (dir.is_empty(), file.is_empty()) {
        (true, _) => clean_path(file),
        (_, true) => clean_path(dir),
        _ => clean_path(&format!("{}/{}", dir, file)),
    }
}

/// Лексическая очистка пути: `//`, `.` и `..` без обращения к файловой системе
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            part => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
