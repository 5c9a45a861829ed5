//! 实体属性定义
//! 条件求值只通过 AttributeSource 读取属性，不关心具体实体类型

pub const IS_ENCRYPTED: &str = "isEncrypted";
pub const IMPLEMENTS_AUTHENTICATION_SCHEME: &str = "implementsAuthenticationScheme";
pub const SANITIZES_INPUT: &str = "sanitizesInput";
pub const IS_PUBLIC: &str = "isPublic";
pub const PROTOCOL: &str = "protocol";
pub const LABEL: &str = "label";
pub const NAME: &str = "name";
pub const KIND: &str = "type";
pub const PROVIDER: &str = "provider";

/// 内置属性名；其余名称都是元素的扩展布尔属性
pub const BUILTIN: &[&str] = &[
    IS_ENCRYPTED,
    IMPLEMENTS_AUTHENTICATION_SCHEME,
    SANITIZES_INPUT,
    IS_PUBLIC,
    PROTOCOL,
    LABEL,
    NAME,
    KIND,
    PROVIDER,
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN.contains(&name)
}

/// 可被条件读取的属性集合
///
/// 返回 `None` 表示该属性不属于此实体类型；条件求值时视为不成立。
pub trait AttributeSource {
    /// 布尔属性
    fn flag(&self, name: &str) -> Option<bool>;

    /// 文本属性
    fn text(&self, name: &str) -> Option<&str>;
}
