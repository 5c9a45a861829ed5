//! 内置结构检查：未加密数据流、公网暴露元素、未加密元素
//! 结构检查先于规则执行，按检查项顺序逐一遍历实体

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::finding::{EntityType, Finding, FindingSource};
use super::severity::{Score, SeverityScorer};
use crate::model::{Provider, ThreatModel};

pub const UNENCRYPTED_DATAFLOW: &str = "Unencrypted dataflow";
pub const PUBLICLY_EXPOSED_ELEMENT: &str = "Publicly exposed element";
pub const UNENCRYPTED_ELEMENT: &str = "Unencrypted element";

const INFORMATION_DISCLOSURE: &str = "Information Disclosure";

/// 结构检查项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralCheck {
    UnencryptedDataflow,
    PublicExposure,
    UnencryptedElement,
}

// (检查项, 厂商) => 最佳实践
static BEST_PRACTICES: Lazy<HashMap<(StructuralCheck, Provider), Vec<&'static str>>> = Lazy::new(|| {
    use Provider::{Aws, Azure, Generic};
    use StructuralCheck::{PublicExposure, UnencryptedDataflow, UnencryptedElement};

    HashMap::from([
        (
            (UnencryptedDataflow, Aws),
            vec![
                "Terminate TLS with ACM certificates on CloudFront or the load balancer",
                "Enforce aws:SecureTransport in bucket and queue policies",
            ],
        ),
        (
            (UnencryptedDataflow, Azure),
            vec![
                "Require HTTPS only on App Service and Storage accounts",
                "Set the minimum TLS version to 1.2",
            ],
        ),
        (
            (UnencryptedDataflow, Generic),
            vec!["Use TLS 1.2 or later for all traffic", "Disable plaintext listeners"],
        ),
        (
            (PublicExposure, Aws),
            vec![
                "Enable S3 Block Public Access at the account level",
                "Restrict security groups and NACLs to known CIDR ranges",
            ],
        ),
        (
            (PublicExposure, Azure),
            vec![
                "Disable anonymous blob access",
                "Use Private Endpoints and Network Security Groups",
            ],
        ),
        (
            (PublicExposure, Generic),
            vec!["Place the component behind a firewall or reverse proxy"],
        ),
        (
            (UnencryptedElement, Aws),
            vec![
                "Enable default encryption with KMS customer managed keys",
                "Rotate KMS keys annually",
            ],
        ),
        (
            (UnencryptedElement, Azure),
            vec![
                "Enable Storage Service Encryption with keys in Key Vault",
                "Enable Transparent Data Encryption for databases",
            ],
        ),
        (
            (UnencryptedElement, Generic),
            vec!["Encrypt data at rest with a managed key service"],
        ),
    ])
});

impl StructuralCheck {
    /// 执行顺序
    pub const ORDER: [StructuralCheck; 3] = [
        StructuralCheck::UnencryptedDataflow,
        StructuralCheck::PublicExposure,
        StructuralCheck::UnencryptedElement,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            StructuralCheck::UnencryptedDataflow => UNENCRYPTED_DATAFLOW,
            StructuralCheck::PublicExposure => PUBLICLY_EXPOSED_ELEMENT,
            StructuralCheck::UnencryptedElement => UNENCRYPTED_ELEMENT,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            StructuralCheck::UnencryptedDataflow => "Encrypt this dataflow in transit, preferably over HTTPS.",
            StructuralCheck::PublicExposure => "Remove public access or restrict it to known clients.",
            StructuralCheck::UnencryptedElement => "Enable encryption at rest for this element.",
        }
    }

    pub fn best_practices(&self, provider: Provider) -> &'static [&'static str] {
        BEST_PRACTICES
            .get(&(*self, provider))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 对模型执行本检查项（数据流按目标元素的厂商取最佳实践）
    pub fn run(&self, model: &ThreatModel) -> Vec<Finding> {
        match self {
            StructuralCheck::UnencryptedDataflow => model
                .dataflows()
                .iter()
                .filter_map(|flow| {
                    let score = SeverityScorer::dataflow(flow)?;
                    let provider = model
                        .element(flow.target())
                        .map(|target| target.kind.provider())
                        .unwrap_or(Provider::Generic);
                    Some(self.finding(model.dataflow_name(flow), EntityType::Dataflow, provider, score))
                })
                .collect(),
            StructuralCheck::PublicExposure | StructuralCheck::UnencryptedElement => model
                .elements()
                .iter()
                .filter_map(|element| {
                    let score = match self {
                        StructuralCheck::PublicExposure => SeverityScorer::exposure(element),
                        _ => SeverityScorer::unencrypted_element(element),
                    }?;
                    Some(self.finding(
                        element.name.clone(),
                        EntityType::Element,
                        element.kind.provider(),
                        score,
                    ))
                })
                .collect(),
        }
    }

    fn finding(&self, entity: String, entity_type: EntityType, provider: Provider, score: Score) -> Finding {
        Finding {
            entity,
            entity_type,
            threat: self.description().to_string(),
            recommendation: self.recommendation().to_string(),
            severity: score.label,
            score: Some(score.value),
            stride: INFORMATION_DISCLOSURE.to_string(),
            best_practices: self
                .best_practices(provider)
                .iter()
                .map(|practice| practice.to_string())
                .collect(),
            source: FindingSource::Structural,
        }
    }
}

/// 按固定顺序执行全部结构检查
pub fn run_structural_checks(model: &ThreatModel) -> Vec<Finding> {
    StructuralCheck::ORDER
        .iter()
        .flat_map(|check| check.run(model))
        .collect()
}
