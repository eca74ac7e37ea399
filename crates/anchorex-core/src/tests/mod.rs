mod fee_market;
