/// Image label the confidential space launcher reads the override allow-list from
pub const ALLOW_ENV_OVERRIDE_LABEL: &str = "tee.launch_policy.allow_env_override";

/// Comma separated allow-list, `None` when nothing may be overridden
pub fn allow_env_override<S: AsRef<str>>(keys: &[S]) -> Option<String> {
  if keys.is_empty() {
    return None;
  }
  let keys = keys.iter().map(|key| key.as_ref()).collect::<Vec<_>>();
  Some(keys.join(","))
}

/// Dockerfile instruction declaring which variables the operator may override
pub fn launch_policy_label<S: AsRef<str>>(keys: &[S]) -> Option<String> {
  allow_env_override(keys)
    .map(|keys| format!(r#"LABEL "{ALLOW_ENV_OVERRIDE_LABEL}"="{keys}""#))
}

/// ## Generate
///
/// Dockerfile injected at the root of every build context.
/// The executor base image runs the notebook, uploads it to the output url
/// then uploads an attestation token bound to the notebook hash.
///
pub fn generate<S: AsRef<str>>(keys: &[S]) -> String {
  let launch_policy = launch_policy_label(keys).unwrap_or_default();
  format!(
    r#"ARG BASE_IMAGE
FROM $BASE_IMAGE
ARG OUTPUT_SIGNED_URL
ARG JUPYTER_FILENAME
ARG CUSTOMTOKEN_SIGNED_URL
ARG USER_WORKSPACE

ENV OUTPUT_SIGNED_URL=$OUTPUT_SIGNED_URL
ENV JUPYTER_FILENAME=$JUPYTER_FILENAME
ENV CUSTOMTOKEN_SIGNED_URL=$CUSTOMTOKEN_SIGNED_URL

WORKDIR /home/jovyan
COPY $USER_WORKSPACE/* ./
{launch_policy}

ENTRYPOINT jupyter nbconvert --execute --to notebook --inplace $JUPYTER_FILENAME --ExecutePreprocessor.timeout=-1 --allow-errors \
    && hash=$(md5sum $JUPYTER_FILENAME | awk '{{ print $1 }}') \
    && curl -X PUT -T $JUPYTER_FILENAME $OUTPUT_SIGNED_URL \
    && ./gen_custom_token --nonce $hash \
    && curl -X PUT -T custom_token $CUSTOMTOKEN_SIGNED_URL
"#
  )
}
