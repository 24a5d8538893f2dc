//! 安全过滤管理器与全局单例
//!
//! [`SecurityManager`] 持有当前生效的匹配器快照（规则集 + 策略开关）。
//! 读取方只在克隆 `Arc` 的瞬间持有读锁，之后在快照上无锁匹配；
//! 加载/重载在锁外完成，成功后整体替换快照，失败则保留原状态。

use std::io::Read;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::matcher::SecurityMatcher;
use super::request::{RequestView, Verdict};
use crate::config::{ConfigManager, GuardConfig};
use crate::error::RsxssResult;
use crate::rule::{ConfigLoader, FileResourceResolver, LoadReport, LoadedConfig, ResourceResolver};

/// 管理器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Active,
    Destroyed,
}

enum Lifecycle {
    Uninitialized,
    Active(Arc<SecurityMatcher>),
    Destroyed,
}

/// 安全过滤配置管理器
/// 未初始化或已销毁时：evaluate 放行、matches 返回 false、sanitize 原样返回
pub struct SecurityManager {
    state: RwLock<Lifecycle>,
    config: GuardConfig,
    resolver: Box<dyn ResourceResolver>,
}

impl SecurityManager {
    /// 使用文件资源解析器创建（根目录取 config.base_dir）
    pub fn new(config: GuardConfig) -> Self {
        let resolver = FileResourceResolver::new(config.base_dir.clone());
        Self::with_resolver(config, Box::new(resolver))
    }

    pub fn with_resolver(config: GuardConfig, resolver: Box<dyn ResourceResolver>) -> Self {
        Self {
            state: RwLock::new(Lifecycle::Uninitialized),
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// 按配置标识加载并生效；重复调用即为重载
    pub fn init(&self, identifier: &str) -> RsxssResult<LoadReport> {
        debug!("SecurityManager init begin, securityconfig={}", identifier);
        let loaded = ConfigLoader::load_from_resolver(self.resolver.as_ref(), identifier, &self.config);
        let report = self.publish(loaded)?;
        debug!("SecurityManager init end");
        Ok(report)
    }

    /// 重载配置，等同于再次 init
    pub fn reload(&self, identifier: &str) -> RsxssResult<LoadReport> {
        self.init(identifier)
    }

    /// 从字节流加载并生效
    pub fn init_config<R: Read>(&self, source: R) -> RsxssResult<LoadReport> {
        self.publish(ConfigLoader::load(source, "<inline>", &self.config))
    }

    /// 从XML文本加载并生效
    pub fn init_config_str(&self, text: &str) -> RsxssResult<LoadReport> {
        self.publish(ConfigLoader::load_str(text, &self.config))
    }

    fn publish(&self, loaded: RsxssResult<LoadedConfig>) -> RsxssResult<LoadReport> {
        let loaded = loaded.inspect_err(|e| error!("安全过滤配置文件加载异常：{}", e))?;
        let report = loaded.report();
        let matcher = Arc::new(SecurityMatcher::from_loaded(loaded, self.config.replacement.clone()));

        *self.state.write() = Lifecycle::Active(matcher);
        info!(
            "安全过滤配置已生效：规则{}条，白名单{}条，策略={:?}",
            report.rule_count, report.exempt_url_count, report.flags
        );
        Ok(report)
    }

    /// 释放规则集，之后的调用按未初始化处理
    pub fn destroy(&self) {
        debug!("SecurityManager destroy begin");
        *self.state.write() = Lifecycle::Destroyed;
        debug!("SecurityManager destroy end");
    }

    pub fn state(&self) -> ManagerState {
        match &*self.state.read() {
            Lifecycle::Uninitialized => ManagerState::Uninitialized,
            Lifecycle::Active(_) => ManagerState::Active,
            Lifecycle::Destroyed => ManagerState::Destroyed,
        }
    }

    /// 当前生效的匹配器快照
    pub fn snapshot(&self) -> Option<Arc<SecurityMatcher>> {
        match &*self.state.read() {
            Lifecycle::Active(matcher) => Some(Arc::clone(matcher)),
            _ => None,
        }
    }

    pub fn matches(&self, text: Option<&str>) -> bool {
        self.snapshot().is_some_and(|matcher| matcher.matches(text))
    }

    pub fn sanitize(&self, text: Option<&str>) -> Option<String> {
        match self.snapshot() {
            Some(matcher) => matcher.sanitize(text).map(|s| s.into_owned()),
            None => text.map(str::to_string),
        }
    }

    pub fn evaluate(&self, request: &mut RequestView) -> Verdict {
        match self.snapshot() {
            Some(matcher) => matcher.evaluate(request),
            None => Verdict::Pass,
        }
    }
}

/// 全局管理器实例（默认配置）
static GLOBAL_MANAGER: Lazy<SecurityManager> =
    Lazy::new(|| SecurityManager::new(ConfigManager::get_default()));

/// 获取全局管理器
pub fn global_manager() -> &'static SecurityManager {
    &GLOBAL_MANAGER
}

/// 按配置标识初始化全局管理器
pub fn init_xss_guard(identifier: &str) -> RsxssResult<LoadReport> {
    GLOBAL_MANAGER.init(identifier)
}

/// 从字节流初始化全局管理器
pub fn init_xss_guard_with_source<R: Read>(source: R) -> RsxssResult<LoadReport> {
    GLOBAL_MANAGER.init_config(source)
}

pub fn xss_matches(text: Option<&str>) -> bool {
    GLOBAL_MANAGER.matches(text)
}

pub fn xss_sanitize(text: Option<&str>) -> Option<String> {
    GLOBAL_MANAGER.sanitize(text)
}

pub fn xss_evaluate(request: &mut RequestView) -> Verdict {
    GLOBAL_MANAGER.evaluate(request)
}

/// 释放全局管理器持有的规则集
pub fn destroy_xss_guard() {
    GLOBAL_MANAGER.destroy()
}
