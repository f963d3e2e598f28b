//! CloudFormation intrinsic functions and pseudo parameters as JSON values.

use serde_json::{Value, json};

use stackforge_common::types::LogicalId;

/// `{ "Ref": id }`
#[must_use]
pub fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

/// `{ "Fn::GetAtt": [id, attribute] }`
#[must_use]
pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

/// `{ "Fn::Sub": pattern }`
#[must_use]
pub fn sub(pattern: &str) -> Value {
    json!({ "Fn::Sub": pattern })
}

/// `{ "Fn::Join": [delimiter, parts] }`
#[must_use]
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// Reference to the deploying account id.
#[must_use]
pub fn account_id() -> Value {
    json!({ "Ref": "AWS::AccountId" })
}

/// Reference to the deploying region.
#[must_use]
pub fn region() -> Value {
    json!({ "Ref": "AWS::Region" })
}

/// Reference to the partition (`aws`, `aws-cn`, ...).
#[must_use]
pub fn partition() -> Value {
    json!({ "Ref": "AWS::Partition" })
}

/// ARN of an S3 bucket given an expression for its name.
#[must_use]
pub fn bucket_arn(bucket_name: Value) -> Value {
    join("", vec![json!("arn:"), partition(), json!(":s3:::"), bucket_name])
}

/// ARN covering every object of an S3 bucket.
#[must_use]
pub fn bucket_objects_arn(bucket_name: Value) -> Value {
    join(
        "",
        vec![json!("arn:"), partition(), json!(":s3:::"), bucket_name, json!("/*")],
    )
}

/// ARN of a regional resource in the deploying account, e.g.
/// `arn:aws:codebuild:eu-west-1:123:project/name`.
#[must_use]
pub fn regional_arn(service: &str, resource: Value) -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            partition(),
            json!(format!(":{service}:")),
            region(),
            json!(":"),
            account_id(),
            json!(":"),
            resource,
        ],
    )
}
