use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("控制台读写失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("命令执行失败: {0}")]
    CommandFailed(String),
}
