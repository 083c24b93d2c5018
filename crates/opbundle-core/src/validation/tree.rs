//! Validator trees for the ClusterServiceVersion and the operator package

use once_cell::sync::Lazy;

use super::node::{ValidatorNode, array_of, contextual, fields, leaf, object_props};
use super::rules::{self, API_VERSION, CRD_NAME, DNS_SUBDOMAIN, EMAIL, KIND, LABEL_KEY, LABEL_VALUE, MEDIA_TYPE, URL};

static CSV_VALIDATOR: Lazy<ValidatorNode> = Lazy::new(build_csv_validator);

static PACKAGE_VALIDATOR: Lazy<ValidatorNode> = Lazy::new(build_package_validator);

/// Validator tree of a ClusterServiceVersion
pub fn csv_validator() -> &'static ValidatorNode {
    &CSV_VALIDATOR
}

/// Validator tree of an operator package
pub fn package_validator() -> &'static ValidatorNode {
    &PACKAGE_VALIDATOR
}

fn build_csv_validator() -> ValidatorNode {
    fields([
        ("metadata", metadata()),
        (
            "spec",
            fields([
                ("displayName", leaf().required().into()),
                ("description", leaf().required().into()),
                (
                    "version",
                    leaf().required().check(rules::semantic_version).into(),
                ),
                ("replaces", contextual(rules::replaces).into()),
                ("minKubeVersion", leaf().check(rules::kube_version).into()),
                ("maturity", leaf().required().check(rules::maturity).into()),
                ("keywords", leaf().required().check(rules::keywords).into()),
                (
                    "maintainers",
                    array_of([
                        ("name", leaf().required().into()),
                        (
                            "email",
                            leaf().required().regex(EMAIL, "Must be a valid email address").into(),
                        ),
                    ])
                    .required_with("At least one maintainer is required")
                    .into(),
                ),
                ("provider", fields([("name", leaf().required().into())])),
                (
                    "links",
                    array_of([
                        ("name", leaf().required().into()),
                        (
                            "url",
                            leaf().required().regex(URL, "Must be a valid URL").into(),
                        ),
                    ])
                    .into(),
                ),
                (
                    "icon",
                    array_of([
                        ("base64data", leaf().required().into()),
                        (
                            "mediatype",
                            leaf()
                                .required()
                                .regex(MEDIA_TYPE, "Must be image/png, image/jpeg, image/gif or image/svg+xml")
                                .into(),
                        ),
                    ])
                    .into(),
                ),
                ("labels", labels().into()),
                (
                    "selector",
                    fields([(
                        "matchLabels",
                        labels()
                            .required_with("At least one label selector is required")
                            .into(),
                    )]),
                ),
                (
                    "installModes",
                    contextual(rules::install_modes)
                        .required_with("At least one install mode is required")
                        .into(),
                ),
                (
                    "customresourcedefinitions",
                    fields([
                        ("owned", owned_crds()),
                        ("required", required_crds()),
                    ]),
                ),
                (
                    "install",
                    fields([
                        ("strategy", leaf().required().into()),
                        (
                            "spec",
                            fields([
                                ("deployments", deployments()),
                                ("permissions", permissions()),
                                ("clusterPermissions", permissions()),
                            ]),
                        ),
                    ]),
                ),
            ]),
        ),
    ])
}

fn metadata() -> ValidatorNode {
    fields([
        (
            "name",
            leaf()
                .required()
                .regex(DNS_SUBDOMAIN, "Must be lowercase letters, digits, '-' and '.'")
                .into(),
        ),
        (
            "annotations",
            fields([
                (
                    "capabilities",
                    leaf().required().check(rules::capability_level).into(),
                ),
                ("categories", leaf().into()),
                ("containerImage", leaf().required().into()),
                ("description", leaf().required().into()),
                (
                    "repository",
                    leaf().regex(URL, "Must be a valid URL").into(),
                ),
                ("createdAt", leaf().check(rules::created_at).into()),
                ("alm-examples", contextual(rules::alm_examples).into()),
            ]),
        ),
    ])
}

fn labels() -> super::node::ObjectPropsRule {
    object_props(
        leaf().regex(LABEL_KEY, "Invalid label key"),
        leaf().regex(LABEL_VALUE, "Invalid label value"),
    )
}

fn descriptors() -> ValidatorNode {
    array_of([
        ("path", leaf().required().into()),
        ("displayName", leaf().required().into()),
        ("description", leaf().into()),
        ("x-descriptors", leaf().check(rules::x_descriptors).into()),
    ])
    .into()
}

fn owned_crds() -> ValidatorNode {
    array_of([
        (
            "name",
            leaf()
                .required()
                .regex(CRD_NAME, "Must be <plural>.<group>, e.g. etcdclusters.etcd.database.coreos.com")
                .into(),
        ),
        ("displayName", leaf().required().into()),
        (
            "kind",
            leaf().required().regex(KIND, "Must be a CamelCase kind").into(),
        ),
        (
            "version",
            leaf()
                .required()
                .regex(API_VERSION, "Must be an API version, e.g. v1beta2")
                .into(),
        ),
        ("description", leaf().required().into()),
        (
            "resources",
            array_of([
                ("kind", leaf().required().regex(KIND, "Must be a CamelCase kind").into()),
                ("version", leaf().required().into()),
            ])
            .into(),
        ),
        ("specDescriptors", descriptors()),
        ("statusDescriptors", descriptors()),
    ])
    .required_with("At least one owned CRD is required")
    .into()
}

fn required_crds() -> ValidatorNode {
    array_of([
        (
            "name",
            leaf()
                .required()
                .regex(CRD_NAME, "Must be <plural>.<group>")
                .into(),
        ),
        ("displayName", leaf().into()),
        (
            "kind",
            leaf().required().regex(KIND, "Must be a CamelCase kind").into(),
        ),
        (
            "version",
            leaf()
                .required()
                .regex(API_VERSION, "Must be an API version, e.g. v1beta2")
                .into(),
        ),
        ("description", leaf().into()),
    ])
    .into()
}

fn deployments() -> ValidatorNode {
    array_of([
        (
            "name",
            leaf()
                .required()
                .regex(DNS_SUBDOMAIN, "Must be lowercase letters, digits, '-' and '.'")
                .into(),
        ),
        ("spec", leaf().required().check(rules::deployment_spec).into()),
    ])
    .required_with("At least one deployment is required")
    .into()
}

fn permissions() -> ValidatorNode {
    array_of([
        (
            "serviceAccountName",
            leaf()
                .required()
                .regex(DNS_SUBDOMAIN, "Must be a valid service account name")
                .into(),
        ),
        ("rules", leaf().required().check(rules::policy_rules).into()),
    ])
    .into()
}

fn build_package_validator() -> ValidatorNode {
    fields([
        (
            "packageName",
            leaf()
                .required()
                .regex(DNS_SUBDOMAIN, "Must be lowercase letters, digits, '-' and '.'")
                .into(),
        ),
        (
            "channels",
            array_of([
                ("name", leaf().required().into()),
                ("currentCSV", leaf().required().into()),
            ])
            .required_with("At least one channel is required")
            .into(),
        ),
        ("defaultChannel", contextual(rules::default_channel).into()),
    ])
}
