//! Header格式转换工具
//! 将 http::HeaderMap 转换为检查用的多值映射

use std::collections::BTreeMap;

use http::HeaderMap;
use tracing::{debug, warn};

/// 单次转换的Header条目上限
const MAX_HEADER_ENTRIES: usize = 1000;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为 名称(小写) -> 值列表
    /// 非可见ASCII的值按UTF-8有损解码，保证仍能被规则检查
    pub fn to_multi_map(header_map: &HeaderMap) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (index, (key, value)) in header_map.iter().enumerate() {
            if index >= MAX_HEADER_ENTRIES {
                warn!("Header条目超过{}条，剩余部分不再转换", MAX_HEADER_ENTRIES);
                break;
            }

            let value_str = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };

            map.entry(key.as_str().to_lowercase())
                .or_default()
                .push(value_str);
        }

        debug!("Header转换完成，生成{}条记录", map.len());
        map
    }
}
