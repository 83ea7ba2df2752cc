use once_cell::sync::OnceCell;

#[derive(Debug)]
pub(crate) struct ReqwestClientError {
    pub(crate) context: &'static str,
    pub(crate) source: reqwest::Error,
}

/// Process wide client, so connections are pooled across identities
pub(crate) fn reqwest_client() -> Result<&'static reqwest::Client, ReqwestClientError> {
    static CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

    CLIENT.get_or_try_init(|| {
        reqwest::Client::builder()
            .build()
            .map_err(|e| ReqwestClientError {
                context: "Client build error",
                source: e,
            })
    })
}
