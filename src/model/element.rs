//! 元素与元素类型注册表
//! 元素类型是封闭枚举，新增类型只需在注册表中加一行

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::attribute::{self, AttributeSource};
use crate::error::RsThreatError;

/// 云厂商分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    Aws,
    Azure,
    Generic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Generic => "Generic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 注册表：变体 => (类型名, 显示名, 厂商, 是否声明 isPublic)
macro_rules! element_kind_registry {
    ($( $variant:ident => ($name:literal, $label:literal, $provider:ident, $exposable:literal) ),+ $(,)?) => {
        /// 元素类型
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ElementKind {
            $( $variant ),+
        }

        impl ElementKind {
            /// 全部类型（注册顺序）
            pub const ALL: &'static [ElementKind] = &[ $( ElementKind::$variant ),+ ];

            /// 类型名（输入 JSON 中的 `type`）
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( ElementKind::$variant => $name ),+
                }
            }

            /// 显示名
            pub fn label(&self) -> &'static str {
                match self {
                    $( ElementKind::$variant => $label ),+
                }
            }

            pub fn provider(&self) -> Provider {
                match self {
                    $( ElementKind::$variant => Provider::$provider ),+
                }
            }

            /// 是否声明 `isPublic` 属性（存储与网络边界类资源）
            pub fn is_exposable(&self) -> bool {
                match self {
                    $( ElementKind::$variant => $exposable ),+
                }
            }
        }
    };
}

element_kind_registry! {
    AwsEc2 => ("AWSEC2", "AWS EC2", Aws, false),
    AwsS3 => ("AWSS3", "AWS S3", Aws, true),
    AwsLambda => ("AWSLambda", "AWS Lambda", Aws, false),
    AwsRds => ("AWSRDS", "AWS RDS", Aws, false),
    AwsDynamoDb => ("AWSDynamoDB", "AWS DynamoDB", Aws, false),
    AwsEks => ("AWSEKS", "AWS EKS", Aws, false),
    AwsEcs => ("AWSECS", "AWS ECS", Aws, false),
    AwsApiGateway => ("AWSAPIGateway", "AWS API Gateway", Aws, false),
    AwsSqs => ("AWSSQS", "AWS SQS", Aws, false),
    AwsSns => ("AWSSNS", "AWS SNS", Aws, false),
    AwsElasticBeanstalk => ("AWSEB", "AWS Elastic Beanstalk", Aws, false),
    AwsCloudFront => ("AWSCloudFront", "AWS CloudFront", Aws, false),
    AwsAlb => ("AWSALB", "AWS ALB", Aws, false),
    AwsNlb => ("AWSNLB", "AWS NLB", Aws, false),
    AwsWaf => ("AWSWAF", "AWS WAF", Aws, false),
    AwsVpc => ("AWSVPC", "AWS VPC", Aws, true),
    AzureVm => ("AzureVM", "Azure VM", Azure, false),
    AzureBlob => ("AzureBlob", "Azure Blob", Azure, true),
    AzureFunction => ("AzureFunction", "Azure Function", Azure, false),
    AzureSql => ("AzureSQL", "Azure SQL", Azure, false),
    AzureCosmosDb => ("AzureCosmosDB", "Azure Cosmos DB", Azure, false),
    AzureAks => ("AzureAKS", "Azure AKS", Azure, false),
    AzureContainer => ("AzureContainer", "Azure Container", Azure, false),
    AzureAppService => ("AzureAppService", "Azure App Service", Azure, false),
    AzureQueue => ("AzureQueue", "Azure Queue", Azure, false),
    AzureEventHub => ("AzureEventHub", "Azure Event Hub", Azure, false),
    AzureLoadBalancer => ("AzureLoadBalancer", "Azure LB", Azure, false),
    AzureFirewall => ("AzureFirewall", "Azure Firewall", Azure, false),
    AzureVNet => ("AzureVNet", "Azure VNet", Azure, true),
    Firewall => ("Firewall", "Firewall", Generic, false),
    LoadBalancer => ("LoadBalancer", "Load Balancer", Generic, false),
    WebApp => ("WebApp", "Web App", Generic, false),
    Api => ("API", "API", Generic, false),
}

impl ElementKind {
    /// 按类型名查找（忽略大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }

    /// 该类型是否声明了给定属性
    pub fn declares(&self, attr: &str) -> bool {
        match attr {
            attribute::IS_ENCRYPTED
            | attribute::IMPLEMENTS_AUTHENTICATION_SCHEME
            | attribute::SANITIZES_INPUT => true,
            attribute::IS_PUBLIC => self.is_exposable(),
            _ => false,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = RsThreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| RsThreatError::UnknownElementKindError(s.to_string()))
    }
}

impl Serialize for ElementKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        ElementKind::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown element type `{}`", name)))
    }
}

/// 元素的布尔属性集
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementAttributes {
    pub is_encrypted: bool,
    pub implements_authentication_scheme: bool,
    pub sanitizes_input: bool,
    pub is_public: bool,
    // 扩展属性，未提供时视为不存在
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, bool>,
}

/// 系统图中的一个节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(flatten)]
    pub attributes: ElementAttributes,
}

impl Element {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: ElementAttributes::default(),
        }
    }

    pub fn encrypted(mut self, value: bool) -> Self {
        self.attributes.is_encrypted = value;
        self
    }

    pub fn authenticated(mut self, value: bool) -> Self {
        self.attributes.implements_authentication_scheme = value;
        self
    }

    pub fn sanitizes_input(mut self, value: bool) -> Self {
        self.attributes.sanitizes_input = value;
        self
    }

    pub fn public(mut self, value: bool) -> Self {
        self.attributes.is_public = value;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: bool) -> Self {
        self.attributes.extra.insert(name.into(), value);
        self
    }

    /// 是否公网暴露（仅对声明 isPublic 的类型有效）
    pub fn is_exposed(&self) -> bool {
        self.flag(attribute::IS_PUBLIC).unwrap_or(false)
    }
}

impl AttributeSource for Element {
    fn flag(&self, name: &str) -> Option<bool> {
        let attrs = &self.attributes;
        match name {
            attribute::IS_ENCRYPTED => Some(attrs.is_encrypted),
            attribute::IMPLEMENTS_AUTHENTICATION_SCHEME => Some(attrs.implements_authentication_scheme),
            attribute::SANITIZES_INPUT => Some(attrs.sanitizes_input),
            attribute::IS_PUBLIC => self.kind.is_exposable().then_some(attrs.is_public),
            // 扩展属性未设置时为 false
            other if attribute::is_builtin(other) => None,
            other => Some(attrs.extra.get(other).copied().unwrap_or(false)),
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        match name {
            attribute::NAME | attribute::LABEL => Some(&self.name),
            attribute::KIND => Some(self.kind.as_str()),
            attribute::PROVIDER => Some(self.kind.provider().as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_catalog() {
        assert_eq!(ElementKind::ALL.len(), 33);
        assert_eq!(ElementKind::from_name("AWSS3"), Some(ElementKind::AwsS3));
        assert_eq!(ElementKind::from_name("azurevnet"), Some(ElementKind::AzureVNet));
        assert_eq!(ElementKind::from_name("API"), Some(ElementKind::Api));
        assert_eq!(ElementKind::from_name("Mainframe"), None);
        assert_eq!(ElementKind::AzureLoadBalancer.label(), "Azure LB");
        assert_eq!(ElementKind::AwsElasticBeanstalk.provider(), Provider::Aws);
    }

    #[test]
    fn test_names_round_trip_through_registry() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_name(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn test_is_public_declared_only_for_exposable_kinds() {
        let exposable: Vec<_> = ElementKind::ALL.iter().filter(|k| k.is_exposable()).collect();
        assert_eq!(
            exposable,
            vec![&ElementKind::AwsS3, &ElementKind::AwsVpc, &ElementKind::AzureBlob, &ElementKind::AzureVNet]
        );

        let bucket = Element::new("bucket", ElementKind::AwsS3).public(true);
        assert_eq!(bucket.flag(attribute::IS_PUBLIC), Some(true));
        assert!(bucket.is_exposed());

        // WebApp 没有 isPublic 属性，输入值被忽略
        let app = Element::new("app", ElementKind::WebApp).public(true);
        assert_eq!(app.flag(attribute::IS_PUBLIC), None);
        assert!(!app.is_exposed());
    }

    #[test]
    fn test_extra_attributes_and_text() {
        let element = Element::new("api", ElementKind::Api).with_attribute("hasRateLimit", true);
        assert_eq!(element.flag("hasRateLimit"), Some(true));
        assert_eq!(element.flag("hasWaf"), Some(false));
        assert_eq!(element.flag(attribute::PROTOCOL), None);
        assert_eq!(element.flag(attribute::NAME), None);
        assert_eq!(element.text(attribute::KIND), Some("API"));
        assert_eq!(element.text(attribute::PROVIDER), Some("Generic"));
        assert_eq!(element.text(attribute::PROTOCOL), None);
    }
}
