//! 渲染能力 - 基础设施层
//!
//! 旧格式渲染器、格式转换器和新格式渲染器都是外部能力，这里只定义接口。
//! 普通函数 / 闭包自动实现这些接口，方便嵌入进程内的渲染器。

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value as JsonValue;

use crate::error::ConversionError;

/// 旧格式渲染器：旧格式文档 → HTML
pub trait LegacyRenderer: Send + Sync {
    fn render<'a>(&'a self, document: &'a JsonValue) -> BoxFuture<'a, anyhow::Result<String>>;
}

/// 格式转换器：旧格式文档 → 新格式文档
pub trait FormatConverter: Send + Sync {
    fn convert<'a>(
        &'a self,
        document: &'a JsonValue,
    ) -> BoxFuture<'a, Result<JsonValue, ConversionError>>;
}

/// 新格式渲染器：新格式文档 → HTML
pub trait NewRenderer: Send + Sync {
    fn render<'a>(&'a self, document: &'a JsonValue) -> BoxFuture<'a, anyhow::Result<String>>;
}

impl<F> LegacyRenderer for F
where
    F: Fn(&JsonValue) -> anyhow::Result<String> + Send + Sync,
{
    fn render<'a>(&'a self, document: &'a JsonValue) -> BoxFuture<'a, anyhow::Result<String>> {
        future::ready(self(document)).boxed()
    }
}

impl<F> FormatConverter for F
where
    F: Fn(&JsonValue) -> Result<JsonValue, ConversionError> + Send + Sync,
{
    fn convert<'a>(
        &'a self,
        document: &'a JsonValue,
    ) -> BoxFuture<'a, Result<JsonValue, ConversionError>> {
        future::ready(self(document)).boxed()
    }
}

impl<F> NewRenderer for F
where
    F: Fn(&JsonValue) -> anyhow::Result<String> + Send + Sync,
{
    fn render<'a>(&'a self, document: &'a JsonValue) -> BoxFuture<'a, anyhow::Result<String>> {
        future::ready(self(document)).boxed()
    }
}
