use crate::config::GlobalSettings;

/// Builds the OData URL for one company/resource in an environment:
/// `{base}/{version}/{tenant}/{environment}/ODataV4/Company('{company}')/{resource}`.
pub fn resolve(
    global: &GlobalSettings,
    environment_name: &str,
    company: &str,
    resource: &str,
) -> String {
    let base_url = global.api_base_url.trim_end_matches('/');
    format!(
        "{base_url}/{}/{}/{environment_name}/ODataV4/Company('{company}')/{resource}",
        global.api_version, global.tenant_id
    )
}
