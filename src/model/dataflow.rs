//! 数据流（有向边）定义

use serde::Serialize;

use super::attribute::{self, AttributeSource};

/// 元素在所属模型中的位置（弱引用，只表示关系）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// 两个元素之间的一条数据流
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataflow {
    pub(crate) source: ElementId,
    pub(crate) target: ElementId,
    pub label: String,
    pub protocol: String,
    pub is_encrypted: bool,
}

impl Dataflow {
    pub fn source(&self) -> ElementId {
        self.source
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    /// 协议是否为 HTTPS（忽略大小写）
    pub fn is_https(&self) -> bool {
        self.protocol.trim().eq_ignore_ascii_case("HTTPS")
    }
}

impl AttributeSource for Dataflow {
    fn flag(&self, name: &str) -> Option<bool> {
        match name {
            attribute::IS_ENCRYPTED => Some(self.is_encrypted),
            _ => None,
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        match name {
            attribute::PROTOCOL => Some(self.protocol.trim()),
            attribute::LABEL | attribute::NAME => Some(&self.label),
            attribute::KIND => Some("Dataflow"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(protocol: &str, encrypted: bool) -> Dataflow {
        Dataflow {
            source: ElementId(0),
            target: ElementId(1),
            label: protocol.to_string(),
            protocol: protocol.to_string(),
            is_encrypted: encrypted,
        }
    }

    #[test]
    fn test_https_is_case_insensitive() {
        assert!(flow("HTTPS", false).is_https());
        assert!(flow("https", false).is_https());
        assert!(flow(" Https ", false).is_https());
        assert!(!flow("HTTP", false).is_https());
        assert!(!flow("", false).is_https());
    }

    #[test]
    fn test_dataflow_attributes() {
        let f = flow("gRPC", true);
        assert_eq!(f.flag(attribute::IS_ENCRYPTED), Some(true));
        assert_eq!(f.flag(attribute::IS_PUBLIC), None);
        assert_eq!(f.text(attribute::PROTOCOL), Some("gRPC"));
        assert_eq!(f.text(attribute::KIND), Some("Dataflow"));
    }
}
