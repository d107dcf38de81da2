/// 测试链数据模型 - 请求定义、集合、测试链与工作区文件
mod model;
mod workspace;

pub use model::{
    ApiKeyLocation, AuthDescriptor, ChainStep, Collection, KeyValue, RequestDefinition,
    StepCondition, TestChain,
};
pub use workspace::{RequestCatalog, Workspace};
