#![no_main]
use {
    arbitrary::Arbitrary,
    libfuzzer_sys::{fuzz_target, Corpus},
    scratchstack_link_integrity::{
        sign_components, verify_components, ChecksumConfig, ExtraParams, LinkIntegrityError, UrlComponents,
        VerificationOutcome,
    },
};

#[derive(Arbitrary, Debug)]
struct LinkInput {
    url: String,
    extra_params: Vec<(String, String)>,
    secret: Vec<u8>,
    additional_data: Option<String>,
}

fuzz_target!(|data: LinkInput| -> Corpus {
    match run_target(data) {
        Ok(()) => Corpus::Keep,
        Err(_) => Corpus::Reject,
    }
});

fn run_target(data: LinkInput) -> Result<(), LinkIntegrityError> {
    let mut builder = ChecksumConfig::builder();
    builder.secret(data.secret);
    if let Some(additional_data) = data.additional_data {
        builder.additional_data(additional_data);
    }
    let config = builder.build()?;

    let unsigned = UrlComponents::parse(&data.url)?;
    let signed = sign_components(&config, &unsigned, ExtraParams::Pairs(data.extra_params))?;
    assert_eq!(verify_components(&config, &signed)?, VerificationOutcome::Valid);

    // The serialized link must survive a trip through a client.
    let reparsed = UrlComponents::parse(&signed.to_url_string())?;
    assert_eq!(verify_components(&config, &reparsed)?, VerificationOutcome::Valid, "{}", signed);
    Ok(())
}
