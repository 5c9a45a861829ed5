//! 模型输入：解析编辑器提交的 JSON 并构建 ThreatModel

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::attribute;
use super::element::{Element, ElementAttributes, ElementKind};
use super::{DEFAULT_MODEL_NAME, ThreatModel};
use crate::error::{RsThreatError, RstResult};
use crate::feed::FeedConfig;

/// 新建数据流时的默认协议
const DEFAULT_PROTOCOL: &str = "HTTP";

// 编辑器会发送 null / undefined，统一视为 false
fn nullable_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// 输入中的元素
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInput {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub is_encrypted: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub implements_authentication_scheme: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub sanitizes_input: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub is_public: bool,
    // 其余字段：仅保留布尔值作为扩展属性
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// 输入中的数据流
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowInput {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub is_encrypted: bool,
}

/// 完整的模型输入
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementInput>,
    #[serde(default)]
    pub flows: Vec<FlowInput>,
    #[serde(default)]
    pub feed_config: Option<FeedConfig>,
}

impl ElementInput {
    /// 转换为元素，类型名必须在注册表中
    pub fn to_element(&self) -> RstResult<Element> {
        let kind: ElementKind = self.kind.parse()?;

        if self.is_public && !kind.declares(attribute::IS_PUBLIC) {
            debug!("element [{}]: {} has no isPublic attribute, value ignored", self.label, kind);
        }

        let extra = self
            .extra
            .iter()
            .filter_map(|(key, value)| value.as_bool().map(|flag| (key.clone(), flag)))
            .collect();

        Ok(Element {
            name: self.label.clone(),
            kind,
            attributes: ElementAttributes {
                is_encrypted: self.is_encrypted,
                implements_authentication_scheme: self.implements_authentication_scheme,
                sanitizes_input: self.sanitizes_input,
                is_public: self.is_public,
                extra,
            },
        })
    }
}

impl ModelInput {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> RstResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从 JSON 字节解析
    pub fn from_slice(bytes: &[u8]) -> RstResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn model_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_MODEL_NAME)
    }

    /// 构建模型：未知类型、重名、未知端点均为构建错误
    pub fn build(&self) -> RstResult<ThreatModel> {
        let mut model = ThreatModel::new(self.model_name());

        for element_input in &self.elements {
            if element_input.label.trim().is_empty() {
                return Err(RsThreatError::InvalidInput(format!(
                    "element of type `{}` has an empty label",
                    element_input.kind
                )));
            }
            model.add_element(element_input.to_element()?)?;
        }

        for flow in &self.flows {
            let protocol = flow
                .protocol
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(DEFAULT_PROTOCOL);
            let label = flow.label.as_deref().unwrap_or(protocol);
            model.add_dataflow(&flow.from, &flow.to, label, protocol, flow.is_encrypted)?;
        }

        model.log_summary();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeSource;

    const EDITOR_PAYLOAD: &str = r#"{
        "name": "Custom System",
        "elements": [
            {"type": "WebApp", "label": "Web App", "isEncrypted": false,
             "implementsAuthenticationScheme": true, "sanitizesInput": false, "isPublic": null},
            {"type": "AWSS3", "label": "Assets", "isEncrypted": true,
             "implementsAuthenticationScheme": false, "sanitizesInput": false, "isPublic": true,
             "hasVersioning": true, "owner": "team-a"}
        ],
        "flows": [
            {"from": "Web App", "to": "Assets", "label": "HTTPS", "protocol": "HTTPS", "isEncrypted": true},
            {"from": "Assets", "to": "Web App"}
        ],
        "feedConfig": {"source": "custom", "apiKey": "", "customUrl": "https://feeds.example/threats.json"}
    }"#;

    #[test]
    fn test_parse_editor_payload() {
        let input = ModelInput::from_json(EDITOR_PAYLOAD).unwrap();
        let model = input.build().unwrap();

        assert_eq!(model.name(), "Custom System");
        assert_eq!(model.elements().len(), 2);
        assert_eq!(model.dataflows().len(), 2);

        let web = model.find_element("Web App").unwrap();
        assert_eq!(web.kind, ElementKind::WebApp);
        assert!(web.attributes.implements_authentication_scheme);
        assert!(!web.attributes.is_public);

        let assets = model.find_element("Assets").unwrap();
        assert!(assets.is_exposed());
        assert_eq!(assets.flag("hasVersioning"), Some(true));
        // 非布尔扩展字段被丢弃
        assert_eq!(assets.flag("owner"), None);

        // 缺省协议与标签
        let second = &model.dataflows()[1];
        assert_eq!(second.protocol, "HTTP");
        assert_eq!(second.label, "HTTP");
        assert!(!second.is_encrypted);

        let feed = input.feed_config.as_ref().unwrap();
        assert_eq!(feed.source, "custom");
        assert_eq!(feed.custom_url.as_deref(), Some("https://feeds.example/threats.json"));
    }

    #[test]
    fn test_unknown_kind_is_build_error() {
        let input = ModelInput::from_json(
            r#"{"elements": [{"type": "Mainframe", "label": "Legacy"}], "flows": []}"#,
        )
        .unwrap();
        let err = input.build().unwrap_err();
        assert!(matches!(err, RsThreatError::UnknownElementKindError(kind) if kind == "Mainframe"));
    }

    #[test]
    fn test_dangling_flow_is_build_error() {
        let input = ModelInput::from_json(
            r#"{"elements": [{"type": "API", "label": "Api"}],
                "flows": [{"from": "Api", "to": "Queue", "protocol": "AMQP"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            input.build().unwrap_err(),
            RsThreatError::UnknownEndpointError { .. }
        ));
    }

    #[test]
    fn test_duplicate_label_is_build_error() {
        let input = ModelInput::from_json(
            r#"{"elements": [{"type": "API", "label": "Api"}, {"type": "WebApp", "label": "Api"}]}"#,
        )
        .unwrap();
        assert!(matches!(input.build().unwrap_err(), RsThreatError::DuplicateNameError(_)));
    }

    #[test]
    fn test_default_model_name() {
        let input = ModelInput::from_json(r#"{"name": "  ", "elements": []}"#).unwrap();
        assert_eq!(input.model_name(), DEFAULT_MODEL_NAME);
    }
}
