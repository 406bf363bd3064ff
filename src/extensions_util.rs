use crate::extensions::*;

pub fn find_supported_versions_ch(
    extensions: &[Extension],
) -> Option<&SupportedVersionsClientHello> {
    for e in extensions {
        if let Extension::SupportedVersionsClientHello(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_supported_versions_sh(
    extensions: &[Extension],
) -> Option<&SupportedVersionsServerHello> {
    for e in extensions {
        if let Extension::SupportedVersionsServerHello(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_key_share_ch(extensions: &[Extension]) -> Option<&KeyShareClientHello> {
    for e in extensions {
        if let Extension::KeyShareClientHello(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_key_share_sh(extensions: &[Extension]) -> Option<&KeyShareServerHello> {
    for e in extensions {
        if let Extension::KeyShareServerHello(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_key_share_retry(extensions: &[Extension]) -> Option<&KeyShareHelloRetryRequest> {
    for e in extensions {
        if let Extension::KeyShareHelloRetryRequest(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_supported_groups(extensions: &[Extension]) -> Option<&NamedGroupList> {
    for e in extensions {
        if let Extension::SupportedGroups(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_signature_algorithms(extensions: &[Extension]) -> Option<&SignatureSchemeList> {
    for e in extensions {
        if let Extension::SignatureAlgorithms(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_server_name(extensions: &[Extension]) -> Option<&ServerNameList> {
    for e in extensions {
        if let Extension::ServerName(Some(v)) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_pre_shared_key_ch(extensions: &[Extension]) -> Option<&OfferedPsks> {
    for e in extensions {
        if let Extension::PreSharedKeyClientHello(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_pre_shared_key_sh(extensions: &[Extension]) -> Option<u16> {
    for e in extensions {
        if let Extension::PreSharedKeyServerHello(v) = e {
            return Some(v.selected_identity.0);
        }
    }
    None
}

pub fn find_psk_key_exchange_modes(extensions: &[Extension]) -> Option<&PskKeyExchangeModes> {
    for e in extensions {
        if let Extension::PskKeyExchangeModes(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn find_cookie(extensions: &[Extension]) -> Option<&Cookie> {
    for e in extensions {
        if let Extension::Cookie(v) = e {
            return Some(v);
        }
    }
    None
}

pub fn has_early_data(extensions: &[Extension]) -> bool {
    extensions.iter().any(|e| matches!(e, Extension::EarlyData))
}

pub fn find_record_size_limit(extensions: &[Extension]) -> Option<u16> {
    for e in extensions {
        if let Extension::RecordSizeLimit(v) = e {
            return Some(*v);
        }
    }
    None
}

pub fn find_alpn_extension(extensions: &[Extension]) -> Option<&ProtocolNameList> {
    for e in extensions {
        if let Extension::ALPN(v) = e {
            return Some(v);
        }
    }
    None
}
