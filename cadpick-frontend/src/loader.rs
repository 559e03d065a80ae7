use std::path::{Path, PathBuf};

use cadpick_config::AppConfig;
use cadpick_core::document::Document;
use cadpick_engine::demo::{DemoEntities, populate_demo};
use cadpick_io::{DocumentLoader, DxfFacade};
use tracing::{info, warn};

/// 文档来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Dxf(PathBuf),
    Demo,
}

/// 统一封装加载后的文档与元信息。
#[derive(Debug)]
pub struct LoadedDocument {
    pub document: Document,
    pub source: DocumentSource,
    pub demo_entities: Option<DemoEntities>,
}

/// 命令行参数优先，其次是配置文件中的 `document.dxf_path`。
pub fn resolve_dxf_path(explicit: Option<&Path>, config: &AppConfig) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.document.dxf_path.clone())
}

/// 从 DXF 加载文档，未指定路径或加载失败时回退到内置示例。
pub fn load_document_or_demo(path: Option<&Path>) -> LoadedDocument {
    load_with(&DxfFacade::new(), path)
}

pub fn load_with<L: DocumentLoader>(loader: &L, path: Option<&Path>) -> LoadedDocument {
    if let Some(path) = path {
        match loader.load(path) {
            Ok(document) => {
                info!(path = %path.display(), "从 DXF 加载文档成功");
                return LoadedDocument {
                    document,
                    source: DocumentSource::Dxf(path.to_path_buf()),
                    demo_entities: None,
                };
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载 DXF 失败，回退到内置示例");
            }
        }
    }

    let mut document = Document::new();
    let demo_entities = populate_demo(&mut document);
    LoadedDocument {
        document,
        source: DocumentSource::Demo,
        demo_entities: Some(demo_entities),
    }
}
