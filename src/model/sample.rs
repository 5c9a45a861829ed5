//! 内置示例模型（AWS 参考架构 / 入门向导）

use super::element::{Element, ElementKind};
use super::ThreatModel;
use crate::error::RstResult;

/// 典型 AWS Web 架构：CloudFront -> ALB -> EC2 -> RDS/S3，API Gateway -> Lambda -> DynamoDB
pub fn aws_reference_model() -> RstResult<ThreatModel> {
    let mut model = ThreatModel::new("AWS Reference Architecture");

    model.add_element(Element::new("CloudFront", ElementKind::AwsCloudFront).encrypted(true))?;
    model.add_element(Element::new("WAF", ElementKind::AwsWaf).encrypted(true))?;
    model.add_element(Element::new("ALB", ElementKind::AwsAlb).encrypted(true))?;
    model.add_element(
        Element::new("App Servers", ElementKind::AwsEc2)
            .authenticated(true)
            .sanitizes_input(true),
    )?;
    model.add_element(Element::new("Orders DB", ElementKind::AwsRds).encrypted(true))?;
    model.add_element(Element::new("Static Assets", ElementKind::AwsS3).public(true))?;
    model.add_element(Element::new("Public API", ElementKind::AwsApiGateway).encrypted(true))?;
    model.add_element(Element::new("Worker", ElementKind::AwsLambda))?;
    model.add_element(Element::new("Sessions", ElementKind::AwsDynamoDb).encrypted(true))?;
    model.add_element(Element::new("VPC", ElementKind::AwsVpc))?;

    model.add_dataflow("CloudFront", "WAF", "HTTPS", "HTTPS", true)?;
    model.add_dataflow("WAF", "ALB", "HTTPS", "HTTPS", true)?;
    model.add_dataflow("ALB", "App Servers", "HTTP", "HTTP", false)?;
    model.add_dataflow("App Servers", "Orders DB", "SQL", "TCP", true)?;
    model.add_dataflow("App Servers", "Static Assets", "HTTPS", "HTTPS", false)?;
    model.add_dataflow("Public API", "Worker", "Invoke", "HTTPS", true)?;
    model.add_dataflow("Worker", "Sessions", "HTTPS", "HTTPS", true)?;

    model.log_summary();
    Ok(model)
}

/// 入门向导生成的两节点模型：WebApp --HTTPS--> API
pub fn wizard_model() -> RstResult<ThreatModel> {
    let mut model = ThreatModel::new("Wizard System");
    model.add_element(Element::new("Web App", ElementKind::WebApp))?;
    model.add_element(Element::new("API", ElementKind::Api))?;
    model.add_dataflow("Web App", "API", "HTTPS", "HTTPS", true)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_models_build() {
        let aws = aws_reference_model().unwrap();
        assert_eq!(aws.elements().len(), 10);
        assert_eq!(aws.dataflows().len(), 7);
        assert!(aws.elements().iter().all(|e| e.kind.provider() == crate::model::Provider::Aws));

        let wizard = wizard_model().unwrap();
        assert_eq!(wizard.elements().len(), 2);
        assert!(wizard.dataflows()[0].is_https());
    }
}
