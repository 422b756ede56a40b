//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (validator derive)：pool 参数 >= 1，sink 名称非空
//! - core_workers <= max_workers
//! - http sink 必须提供合法的 base_url

use contracts::{ContractError, PersistenceBlueprint, SinkType};
use validator::{Validate, ValidationErrors};

/// 校验 PersistenceBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &PersistenceBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(first_field_error)?;
    validate_pool(blueprint)?;
    validate_sink(blueprint)?;
    Ok(())
}

/// 将 validator 的错误集合转换为第一个字段错误
fn first_field_error(errors: ValidationErrors) -> ContractError {
    let mut paths = Vec::new();
    collect_paths(&errors, String::new(), &mut paths);
    paths.sort();

    match paths.into_iter().next() {
        Some((field, message)) => ContractError::config_validation(field, message),
        None => ContractError::config_validation("<root>", errors.to_string()),
    }
}

fn collect_paths(errors: &ValidationErrors, prefix: String, out: &mut Vec<(String, String)>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let message = list
                    .first()
                    .map(|e| format!("constraint '{}' violated", e.code))
                    .unwrap_or_else(|| "invalid value".to_string());
                out.push((path, message));
            }
            ValidationErrorsKind::Struct(inner) => collect_paths(inner, path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_paths(inner, format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

/// 校验工作池上下限
fn validate_pool(blueprint: &PersistenceBlueprint) -> Result<(), ContractError> {
    let pool = &blueprint.pool;
    if pool.core_workers > pool.max_workers {
        return Err(ContractError::config_validation(
            "pool.core_workers / pool.max_workers",
            format!(
                "core_workers ({}) must be <= max_workers ({})",
                pool.core_workers, pool.max_workers
            ),
        ));
    }
    Ok(())
}

/// 校验 sink 类型特定参数
fn validate_sink(blueprint: &PersistenceBlueprint) -> Result<(), ContractError> {
    let sink = &blueprint.sink;
    if sink.sink_type != SinkType::Http {
        return Ok(());
    }

    let base_url = sink.params.get("base_url").ok_or_else(|| {
        ContractError::config_validation("sink.params.base_url", "http sink requires base_url")
    })?;

    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "sink.params.base_url",
            format!("base_url must start with http:// or https://, got '{base_url}'"),
        ));
    }

    if let Some(timeout) = sink.params.get("timeout_ms") {
        if timeout.parse::<u64>().map_or(true, |ms| ms == 0) {
            return Err(ContractError::config_validation(
                "sink.params.timeout_ms",
                format!("timeout_ms must be a positive integer, got '{timeout}'"),
            ));
        }
    }

    Ok(())
}
